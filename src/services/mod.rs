pub mod reference_api;
