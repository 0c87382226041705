//! Domain models for the Ringer trunk platform
//!
//! A [`SipTrunk`] is assembled from cohesive sub-structures, one module each.
//! These are plain data types; the validators and rate logic that operate on
//! them live in `ringer-services`.

pub mod exclusion;
pub mod features;
pub mod number;
pub mod overrides;
pub mod rate;
pub mod routing;
pub mod security;
pub mod trunk;

pub use exclusion::{DestinationExclusions, ExclusionReason, ProviderExclusion, TrunkExclusions};
pub use features::{
    CallLimits, CicDip, Codec, DipIntegration, DtmfMode, FaxSupport, HomerCapture, LrnDip,
    LrnProvider, MediaSettings, QualityThresholds, RtpProxyMode, TrunkFeatures, TrunkMonitoring,
};
pub use number::DialedNumber;
pub use overrides::{DynamicOverride, MatchType, OverrideCategory, StaticOverrides, TrunkOverrides};
pub use rate::{compute_margin, Margin, MarginEntry, RateLimiting, TrunkRates, ZoneRate};
pub use routing::{
    AniClassification, JurisdictionBehavior, JurisdictionPolicy, PartitionAssignment,
    TimeSchedule, TrafficZone, TrunkRouting,
};
pub use security::{
    AuthType, CarrierCredentials, IpWhitelistEntry, SipCredentials, TrunkAuthentication,
    TrunkConnection, Transport,
};
pub use trunk::{
    ProviderType, QualityTier, SipTrunk, TrunkBasicInfo, TrunkDirection, TrunkPurpose,
    TrunkStats, TrunkStatus, TrunkType,
};
