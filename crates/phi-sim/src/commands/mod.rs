pub mod bao;
pub mod fit;
pub mod forecast;
pub mod modulate;
pub mod sweep;
