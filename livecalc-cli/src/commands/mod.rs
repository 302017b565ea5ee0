pub mod export_csv;
pub mod run;
pub mod validate;
