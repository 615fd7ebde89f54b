/// A physical item tracked by identifier, location, category, and tag.
///
/// Identifiers are assigned by the backend and mirrored verbatim into the
/// local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
  pub id: i64,
  pub username: String,
  /// Visual category the asset belongs to
  pub set: String,
  pub latitude: String,
  pub longitude: String,
  pub name: String,
  pub description: String,
  /// Free-form tag, the only field mutable after creation
  pub tag: String,
}

/// Fields a user supplies when tagging a new asset.
#[derive(Debug, Clone)]
pub struct NewAsset {
  pub username: String,
  pub set: String,
  pub latitude: String,
  pub longitude: String,
  pub tag: String,
}
