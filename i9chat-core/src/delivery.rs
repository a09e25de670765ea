//! Delivery records and the directory entities they point at.

use serde::{Deserialize, Serialize};

use crate::address::Address;

pub const ORIGIN: usize = 0;
pub const DESTINATION: usize = 1;

/// Situation assigned to deliveries created from the chat.
pub const NEW_DELIVERY_SITUATION: &str = "Pendente";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: u64,
    /// Origin at position 0, destination at position 1.
    pub addresses: [Address; 2],
    #[serde(rename = "entregador")]
    pub deliveryman: String,
    #[serde(rename = "preco")]
    pub price: f64,
    #[serde(rename = "situacao")]
    pub situation: String,
}

impl Delivery {
    pub fn origin(&self) -> &Address {
        &self.addresses[ORIGIN]
    }

    pub fn destination(&self) -> &Address {
        &self.addresses[DESTINATION]
    }

    /// Multi-line summary shown in the chat transcript.
    pub fn summary(&self) -> String {
        format!(
            "Entrega #{}\nOrigem: {}\nDestino: {}\nEntregador: {}\nValor: R$ {:.2}\nSituação: {}",
            self.id,
            self.origin(),
            self.destination(),
            self.deliveryman,
            self.price,
            self.situation
        )
    }
}

/// A courier ("entregador").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Courier {
    pub id: u64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "veiculo", default)]
    pub vehicle: Option<String>,
}

impl Courier {
    pub fn summary(&self) -> String {
        let mut s = format!("Entregador #{}: {}", self.id, self.name);
        if let Some(v) = &self.vehicle {
            s.push_str(&format!("\nVeículo: {v}"));
        }
        if let Some(p) = &self.phone {
            s.push_str(&format!("\nTelefone: {p}"));
        }
        s
    }
}

/// An entry of the user directory, used to resolve the responsible party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "endereco", default)]
    pub address: Option<Address>,
}

impl UserRecord {
    /// Case- and whitespace-insensitive name match.
    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }
}

fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
