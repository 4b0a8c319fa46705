use sessvault_protocol::RemoteLocation;

/// Handle to a stored blob: the location of its meta record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobDescriptor {
    pub location: RemoteLocation,
}

/// A blob read back together with its recorded description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedBlob {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}
