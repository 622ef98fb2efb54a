pub mod openexchangerates;
pub mod visa;

pub use openexchangerates::OpenExchangeRatesProvider;
pub use visa::VisaProvider;
