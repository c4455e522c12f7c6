use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Owner recorded on assets created while the backend is unreachable.
pub const LOCAL_ASSET_OWNER: &str = "current-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Vehicle,
    Property,
    Business,
    Other,
}

/// Something the user owns and may insure: a vehicle, property or business.
///
/// `details` is free-form (make/model/registration for vehicles, address for
/// property, and so on) and is replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub user: String,
    pub asset_type: AssetType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl Asset {
    /// Build the record the backend would have returned for `input`.
    pub fn from_input(id: String, input: CreateAssetInput, now: DateTime<Utc>) -> Self {
        let stamp = now.to_rfc3339();
        Self {
            id,
            user: LOCAL_ASSET_OWNER.to_string(),
            asset_type: input.asset_type,
            name: input.name,
            description: input.description,
            details: input.details,
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }

    /// Shallow merge of `patch` over this asset, bumping `updated_at`.
    pub fn apply(&mut self, patch: &AssetPatch, now: DateTime<Utc>) {
        if let Some(asset_type) = patch.asset_type {
            self.asset_type = asset_type;
        }
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(ref details) = patch.details {
            self.details = details.clone();
        }
        self.updated_at = now.to_rfc3339();
    }

    pub fn is_vehicle(&self) -> bool {
        self.asset_type == AssetType::Vehicle
    }
}

/// Body for `POST assets/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAssetInput {
    pub asset_type: AssetType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Value,
}

/// Body for `PATCH assets/{id}/`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
