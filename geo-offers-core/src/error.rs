//! Error types for store, cache and feed collaborators.

use thiserror::Error;

use crate::ExternalId;

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Offer with external id {external_id} already exists")]
    DuplicateOffer { external_id: ExternalId },

    #[error("Offer with external id {external_id} not found")]
    OfferNotFound { external_id: ExternalId },

    #[error("Record store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Cached value under {key} is invalid: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Upstream offer feed errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Feed request for page {page} failed: {reason}")]
    Request { page: u32, reason: String },

    #[error("Feed page {page} returned HTTP {status}")]
    Status { page: u32, status: u16 },

    #[error("Feed page {page} could not be decoded: {reason}")]
    Decode { page: u32, reason: String },

    #[error("Feed is not configured: {reason}")]
    NotConfigured { reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type FeedResult<T> = Result<T, FeedError>;
