pub mod assembler;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod symbols;

pub use assembler::{assemble, assemble_file, first_pass, to_bytes};
pub use encoder::encode;
pub use error::AsmError;
pub use parser::parse_line;
pub use symbols::SymbolTable;
