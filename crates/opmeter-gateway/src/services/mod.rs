//! Built-in operation services.

pub mod checkout;
pub mod echo;

pub use checkout::CheckoutService;
pub use echo::EchoService;
