pub mod convert;
pub mod fem;
pub mod run;
