mod csr;
pub mod keyauth;
mod transport;
mod types;

pub use csr::{read_csr_domains, CsrDomains};
pub use transport::AcmeTransport;
pub use types::{
    Account, Authorization, Challenge, Identifier, NewAccount, NewOrder, Order, DNS_01, HTTP_01,
    SUPPORTED_CHALLENGE_TYPES, TLS_ALPN_01,
};
