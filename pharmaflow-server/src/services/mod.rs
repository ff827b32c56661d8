//! External collaborators
//!
//! - [`PaymentGateway`] - charge at placement ([`MockPaymentGateway`])
//! - [`Geocoder`] - address to coordinates ([`MockGeocoder`])
//! - [`DocumentStore`] - prescription and verification uploads ([`LocalDocumentStore`])

pub mod documents;
pub mod geocoding;
pub mod payment;

pub use documents::{DocumentError, DocumentStore, LocalDocumentStore, StoredDocument};
pub use geocoding::{GeocodeError, Geocoder, MockGeocoder};
pub use payment::{MockPaymentGateway, PaymentError, PaymentGateway, PaymentRequest, PaymentResult};
