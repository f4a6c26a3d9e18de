use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsmError {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("{what} {value} out of range")]
    Range { what: &'static str, value: i64 },
    #[error("{what} {value:#x} is not {align}-byte aligned")]
    Alignment {
        what: &'static str,
        value: i64,
        align: u64,
    },
    #[error("invalid operand: {0}")]
    InvalidOperand(String),
    #[error("{0} does not accept this operand type")]
    UnsupportedOperandType(&'static str),
    #[error("register `{0}` out of range")]
    RegisterOutOfRange(String),
    #[error("label pass counted {expected} instructions but encoding produced {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<AsmError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AsmError {
    pub(crate) fn at(self, line: usize) -> Self {
        AsmError::Line {
            line,
            source: Box::new(self),
        }
    }

    /// The underlying error with any line context stripped.
    pub fn kind(&self) -> &AsmError {
        match self {
            AsmError::Line { source, .. } => source.kind(),
            other => other,
        }
    }
}
