//! Shipping address captured at checkout.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Recipient address supplied by the buyer at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub city: String,
    pub postal_code: String,
    pub address: String,
}

impl ShippingAddress {
    /// Ensures every field is present.
    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("address", &self.address),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "address is missing: {}",
                missing.join(", ")
            )))
        }
    }

    fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }
}

/// Immutable copy of the address and shipping method stored on an order.
///
/// Never re-read from the buyer's live profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub recipient: ShippingAddress,
    pub shipping_method: Option<String>,
}

impl AddressSnapshot {
    /// Validates and captures the address. A blank shipping method is dropped.
    pub fn capture(
        address: &ShippingAddress,
        shipping_method: Option<&str>,
    ) -> Result<Self, DomainError> {
        address.validate()?;
        Ok(Self {
            recipient: address.trimmed(),
            shipping_method: shipping_method
                .map(str::trim)
                .filter(|method| !method.is_empty())
                .map(str::to_string),
        })
    }
}
