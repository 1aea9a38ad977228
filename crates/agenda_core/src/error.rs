use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message) => message,
            Self::InvalidData(message) => message,
            Self::Io(message) => message,
        }
    }
}

/// Recoverable failures produced while normalizing user-supplied dates and times.
///
/// None of these are fatal: the dialogue layer turns each one into a prompt
/// asking the user to re-enter the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("relative or weekday expression `{0}` does not name a specific day")]
    RelativeOrAmbiguousDate(String),
    #[error("{day:02}/{month:02}/{year} is not a calendar date")]
    InvalidCalendarDate { day: u8, month: u8, year: i32 },
    #[error("unknown month name `{0}`")]
    UnknownMonthName(String),
    #[error("unrecognized date format `{0}`")]
    UnrecognizedFormat(String),
    #[error("time `{0}` needs am or pm")]
    AmbiguousMeridiem(String),
}

impl ParseFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::RelativeOrAmbiguousDate(_) => "relative_or_ambiguous_date",
            Self::InvalidCalendarDate { .. } => "invalid_calendar_date",
            Self::UnknownMonthName(_) => "unknown_month_name",
            Self::UnrecognizedFormat(_) => "unrecognized_format",
            Self::AmbiguousMeridiem(_) => "ambiguous_meridiem",
        }
    }
}

impl From<ParseFailure> for AppError {
    fn from(failure: ParseFailure) -> Self {
        AppError::invalid_input(failure.to_string())
    }
}
