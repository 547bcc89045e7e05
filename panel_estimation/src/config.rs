// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A single cell of a quarter table.
///
/// Quarter files mix numeric survey variables with coded text fields, so a
/// cell is either a number, a piece of text, or nothing at all.
#[derive(PartialEq, Debug, Clone)]
pub enum Datum {
    Number(f64),
    Text(String),
    Empty,
}

impl Datum {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// The cell as an integer, for identifier-like columns. A number with a
    /// fractional part is not an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Number(x) if x.fract() == 0.0 => Some(*x as i64),
            _ => None,
        }
    }
}

/// A table with named columns, as read from one quarter file.
#[derive(PartialEq, Debug, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Datum>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Datum>>) -> Table {
        Table { columns, rows }
    }

    /// The position of the first column with this name, if any.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

// ******** Output data structures *********

/// Five normalized quarter tables concatenated and sorted by
/// (consuming unit, wave). Built once per survey year by
/// [assemble_panel](crate::assemble_panel) or
/// [PanelBuilder](crate::PanelBuilder); the estimator only ever borrows it.
#[derive(PartialEq, Debug, Clone)]
pub struct Panel {
    pub table: Table,
}

// The derived columns prepended by the normalizer, in order.
pub const NOMINAL_YEAR: &str = "nominal_year";
pub const NOMINAL_QUARTER: &str = "nominal_quarter";
pub const CONSUMING_UNIT_ID: &str = "consuming_unit_id";
pub const WAVE_ID: &str = "wave_id";
pub const INTERVIEW_MONTH: &str = "interview_month";
pub const INTERVIEW_YEAR: &str = "interview_year";
pub const WEIGHT: &str = "weight";
pub const MONTHS_IN_SCOPE: &str = "months_in_scope";

// ********* Configuration **********

/// Whether a survey variable is a flow accumulated over the months in scope
/// or a point-in-time quantity.
///
/// An expense observed over a partial quarter under-reports the quarterly
/// rate, so it is rescaled back up before combining. A demographic quantity
/// is not rescaled; a partial-scope record simply carries less weight.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VariableType {
    Expense,
    Demographic,
}

impl std::str::FromStr for VariableType {
    type Err = EstimationError;

    fn from_str(tag: &str) -> Result<VariableType, EstimationError> {
        match tag {
            "expense" => Ok(VariableType::Expense),
            "demographic" => Ok(VariableType::Demographic),
            _ => Err(EstimationError::InvalidVariableType {
                tag: tag.to_string(),
            }),
        }
    }
}

/// Names of the raw survey columns the normalizer consumes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceColumns {
    /// Compound identifier: the consuming unit digits followed by a final
    /// interview-sequence digit.
    pub compound_id: &'static str,
    /// Calendar month the interview took place.
    pub interview_month: &'static str,
    /// Calendar year the interview took place.
    pub interview_year: &'static str,
    /// Sampling weight of the record.
    pub weight: &'static str,
}

impl SourceColumns {
    /// The column names used by the interview survey quarter files.
    pub const DEFAULT: SourceColumns = SourceColumns {
        compound_id: "NEWID",
        interview_month: "QINTRVMO",
        interview_year: "QINTRVYR",
        weight: "FINLWT21",
    };
}

/// What to do with a quarter that has records but zero total effective
/// weight.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DegenerateQuarterRule {
    /// The quarter estimate is NaN and flows into the annual combination,
    /// so the gap stays visible downstream.
    PropagateNan,
    /// Estimation stops with
    /// [EstimationError::DegenerateQuarter].
    Fail,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct EstimationOptions {
    pub degenerate_quarter: DegenerateQuarterRule,
}

impl EstimationOptions {
    pub const DEFAULT: EstimationOptions = EstimationOptions {
        degenerate_quarter: DegenerateQuarterRule::PropagateNan,
    };
}

// ********* Errors **********

/// Errors that prevent normalization, assembly or estimation from
/// completing. Every precondition violation fails immediately; there is no
/// partial-result mode.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EstimationError {
    /// An out-of-range month, quarter or compound identifier in the input.
    InvalidInput { message: String },
    /// The wrong number of quarter tables, or tables from different years.
    ArityError { message: String },
    /// The panel spans more than one nominal year. Pooled estimation over
    /// several survey years is not supported.
    MultiYearUnsupported,
    /// The variable type tag is not `expense` or `demographic`.
    InvalidVariableType { tag: String },
    /// The requested column is absent from the table.
    VariableNotFound { variable: String },
    /// A quarter had records but zero total effective weight, under
    /// [DegenerateQuarterRule::Fail].
    DegenerateQuarter { quarter: u8 },
}

impl Error for EstimationError {}

impl Display for EstimationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimationError::InvalidInput { message } => write!(f, "invalid input: {}", message),
            EstimationError::ArityError { message } => write!(f, "{}", message),
            EstimationError::MultiYearUnsupported => {
                write!(f, "multi-survey year estimation is not supported")
            }
            EstimationError::InvalidVariableType { tag } => {
                write!(
                    f,
                    "unknown variable type {:?}, expected expense or demographic",
                    tag
                )
            }
            EstimationError::VariableNotFound { variable } => {
                write!(f, "variable {:?} not found in the table", variable)
            }
            EstimationError::DegenerateQuarter { quarter } => {
                write!(f, "quarter {} has zero total effective weight", quarter)
            }
        }
    }
}
