use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GroupingResult<T> = Result<T, GroupingError>;
pub type ParserResult<T> = GroupingResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupingErrorCategory {
    ConfigurationError,
    FormatError,
    RangeError,
    TypeMismatchError,
    IoSystemError,
    Cancelled,
}

impl GroupingErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ConfigurationError => 2,
            Self::FormatError => 3,
            Self::RangeError => 4,
            Self::TypeMismatchError => 5,
            Self::IoSystemError => 6,
            Self::Cancelled => 130,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationError => "ConfigurationError",
            Self::FormatError => "FormatError",
            Self::RangeError => "RangeError",
            Self::TypeMismatchError => "TypeMismatchError",
            Self::IoSystemError => "IoSystemError",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Cancellation is a terminal state requested by the caller, not a failure.
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingError {
    category: GroupingErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl GroupingError {
    pub fn new(
        category: GroupingErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GroupingErrorCategory::ConfigurationError, placeholder, message)
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GroupingErrorCategory::FormatError, placeholder, message)
    }

    pub fn range(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GroupingErrorCategory::RangeError, placeholder, message)
    }

    pub fn type_mismatch(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GroupingErrorCategory::TypeMismatchError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GroupingErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn cancelled(phase: &str) -> Self {
        Self::new(
            GroupingErrorCategory::Cancelled,
            "RUN.CANCELLED",
            format!("grouping cancelled during {}", phase),
        )
    }

    pub const fn category(&self) -> GroupingErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self.category, GroupingErrorCategory::Cancelled)
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for GroupingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for GroupingError {}
