use std::fmt;

use serde::{Deserialize, Serialize};

/// A buyer invoices are issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub company_name: String,
    /// Company registration code; unique per client.
    pub company_code: String,
    /// VAT (PVM) code, if the client is VAT-registered.
    pub pvm_code: Option<String>,
    pub address: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl fmt::Display for Client {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} ({} {})",
            self.company_name, self.first_name, self.last_name
        )
    }
}

/// For creating new clients (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub company_name: String,
    pub company_code: String,
    pub pvm_code: Option<String>,
    pub address: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}
