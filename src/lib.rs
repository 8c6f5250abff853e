#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Fitting;
#[allow(non_snake_case)]
pub mod Slit;
#[allow(non_snake_case)]
pub mod Spectra;
#[allow(non_snake_case)]
pub mod Utils;
pub mod slit_tools;
