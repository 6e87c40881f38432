/// Backend identifiers are opaque strings assigned by the server.
pub type EntityId = String;

/// Server-formatted ISO-8601 timestamps, kept verbatim.
pub type Timestamp = String;
