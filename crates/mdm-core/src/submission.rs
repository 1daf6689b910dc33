//! Request types, regions, and the typed `submitted_data` payload.
//!
//! The payload variant determines which [`RequestType`] it is valid for; the
//! pairing is checked on creation and on every edit so the two never drift.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The kind of master-data change being requested.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum RequestType {
  #[serde(rename = "WBS")]
  #[strum(serialize = "WBS")]
  Wbs,
  #[serde(rename = "PCCC")]
  #[strum(serialize = "PCCC")]
  Pccc,
  #[serde(rename = "PC")]
  #[strum(serialize = "PC")]
  Pc,
  #[serde(rename = "CC")]
  #[strum(serialize = "CC")]
  Cc,
  Lock,
  Unlock,
  Modify,
}

/// Business region a request belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Region {
  De,
  Nl,
  Se,
  Dk,
  Uk,
}

/// What a WBS or PCCC row asks to do with the master-data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
  New,
  Update,
  Lock,
  Unlock,
  Close,
}

/// The master-data object kind targeted by modify / lock requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
  #[serde(rename = "WBS")]
  Wbs,
  #[serde(rename = "PC")]
  Pc,
  #[serde(rename = "CC")]
  Cc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockAction {
  Lock,
  Unlock,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A single WBS element row. Optional form fields land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WbsData {
  pub change_type:        ChangeType,
  pub controlling_area:   String,
  pub company_code:       String,
  pub project_name:       String,
  pub project_definition: String,
  pub responsible_pccc:   String,
  pub region:             Region,
  #[serde(flatten)]
  pub extra:              serde_json::Map<String, serde_json::Value>,
}

/// A combined profit/cost centre record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcccData {
  pub change_type:        ChangeType,
  pub pccc_id:            String,
  pub description:        String,
  pub controlling_area:   String,
  pub company_code:       String,
  pub responsible_person: String,
  pub region:             Region,
  #[serde(flatten)]
  pub extra:              serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitCenterData {
  pub profit_center_name: String,
  pub department:         String,
  pub region:             Region,
  #[serde(flatten)]
  pub extra:              serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenterData {
  pub cost_center_name: String,
  pub department:       String,
  pub manager:          String,
  pub region:           Region,
  #[serde(flatten)]
  pub extra:            serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyData {
  pub object_id:   String,
  pub object_type: ObjectType,
  /// Free-text description of the requested changes.
  pub changes:     String,
  pub region:      Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockUnlockData {
  pub action:         LockAction,
  pub object_id:      String,
  pub object_type:    ObjectType,
  pub reason:         String,
  pub region:         Region,
  pub effective_date: Option<NaiveDate>,
}

// ─── SubmittedData ───────────────────────────────────────────────────────────

/// The typed payload of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SubmittedData {
  Wbs(WbsData),
  /// Ordered WBS rows submitted together; each row carries its own region.
  BulkWbs(Vec<WbsData>),
  Pccc(PcccData),
  ProfitCenter(ProfitCenterData),
  CostCenter(CostCenterData),
  Modify(ModifyData),
  LockUnlock(LockUnlockData),
}

impl SubmittedData {
  /// The serde tag of this variant.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Wbs(_) => "wbs",
      Self::BulkWbs(_) => "bulk_wbs",
      Self::Pccc(_) => "pccc",
      Self::ProfitCenter(_) => "profit_center",
      Self::CostCenter(_) => "cost_center",
      Self::Modify(_) => "modify",
      Self::LockUnlock(_) => "lock_unlock",
    }
  }

  /// Whether this payload is a valid shape for `request_type`.
  pub fn matches(&self, request_type: RequestType) -> bool {
    match self {
      Self::Wbs(_) | Self::BulkWbs(_) => request_type == RequestType::Wbs,
      Self::Pccc(_) => request_type == RequestType::Pccc,
      Self::ProfitCenter(_) => request_type == RequestType::Pc,
      Self::CostCenter(_) => request_type == RequestType::Cc,
      Self::Modify(_) => request_type == RequestType::Modify,
      Self::LockUnlock(d) => match d.action {
        LockAction::Lock => request_type == RequestType::Lock,
        LockAction::Unlock => request_type == RequestType::Unlock,
      },
    }
  }

  pub fn ensure_matches(&self, request_type: RequestType) -> Result<()> {
    if self.matches(request_type) {
      Ok(())
    } else {
      Err(Error::DataTypeMismatch {
        expected: request_type,
        found:    self.discriminant(),
      })
    }
  }

  pub fn is_bulk(&self) -> bool { matches!(self, Self::BulkWbs(_)) }

  /// Number of records carried (1 for single submissions).
  pub fn len(&self) -> usize {
    match self {
      Self::BulkWbs(rows) => rows.len(),
      _ => 1,
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Distinct regions in record order.
  pub fn regions(&self) -> Vec<Region> {
    let all: Vec<Region> = match self {
      Self::Wbs(d) => vec![d.region],
      Self::BulkWbs(rows) => rows.iter().map(|r| r.region).collect(),
      Self::Pccc(d) => vec![d.region],
      Self::ProfitCenter(d) => vec![d.region],
      Self::CostCenter(d) => vec![d.region],
      Self::Modify(d) => vec![d.region],
      Self::LockUnlock(d) => vec![d.region],
    };
    let mut distinct = Vec::with_capacity(all.len());
    for region in all {
      if !distinct.contains(&region) {
        distinct.push(region);
      }
    }
    distinct
  }

  /// The region of the first record, if any.
  pub fn primary_region(&self) -> Option<Region> {
    self.regions().first().copied()
  }
}
