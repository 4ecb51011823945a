//! Canonical column names referenced by the pipeline stages and rules.
//!
//! The canonical schema itself comes from the mapping specification's
//! header row; these constants name the columns the repair, derivation,
//! and validation logic touches directly.

pub const SOURCE: &str = "SOURCE";
pub const BHA: &str = "BHA";
pub const OPERATOR: &str = "OPERATOR";
pub const COUNTY: &str = "COUNTY";
pub const STATE: &str = "STATE";
pub const BASIN: &str = "BASIN";
pub const FORMATION: &str = "FORMATION";
pub const FORM_FAM: &str = "FORM_FAM";
pub const DATE_IN: &str = "DATE_IN";
pub const DATE_OUT: &str = "DATE_OUT";
pub const TIME_IN: &str = "TIME_IN";
pub const TIME_OUT: &str = "TIME_OUT";
pub const START_DATE: &str = "START_DATE";
pub const END_DATE: &str = "END_DATE";
pub const BEND: &str = "BEND";
pub const BEND_HSG: &str = "BEND_HSG";
pub const JOB_TYPE: &str = "JOB_TYPE";
pub const LOBES: &str = "LOBES";
pub const STAGES: &str = "STAGES";
pub const LOBE_STAGE: &str = "LOBE/STAGE";
pub const DDS: &str = "DDS";
pub const SN: &str = "SN";
pub const MOTOR_MAKE: &str = "MOTOR_MAKE";
pub const MOTOR_TYPE2: &str = "MOTOR_TYPE2";
pub const CIRC_HOURS: &str = "CIRC_HOURS";
pub const DRILLING_HOURS: &str = "DRILLING_HOURS";
pub const TOTAL_HOURS: &str = "Total Hrs (C+D)";
pub const UPDATE: &str = "UPDATE";
pub const PHASES: &str = "PHASES";
pub const PHASE_CALC: &str = "Phase_CALC";
pub const INCIDENT_NUM: &str = "INCIDENT_NUM";
pub const REPORTED_AS: &str = "REPORTED_AS";
pub const QC_FLAG: &str = "QC_FLAG";
