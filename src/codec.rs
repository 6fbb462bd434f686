//! Codec Layer
//!
//! Binary serialization of log payloads. Each payload type gets exactly one
//! codec; processors, views and emitters are generic over the codec so the
//! payload type is fixed at compile time and decoded once, at the point the
//! bytes leave the log.

use std::marker::PhantomData;

use crate::domain::{Deposit, DepositHistory, FlagEvent, FlagValue};

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to decode {type_name}: {source}")]
    Decode {
        type_name: &'static str,
        #[source]
        source: prost::DecodeError,
    },
}

/// Bidirectional serialization for one payload type.
pub trait Codec: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    fn encode(value: &Self::Value) -> Vec<u8>;

    fn decode(bytes: &[u8]) -> Result<Self::Value, CodecError>;
}

/// Protobuf codec for any prost message.
pub struct ProtoCodec<M>(PhantomData<fn() -> M>);

impl<M> Codec for ProtoCodec<M>
where
    M: prost::Message + Default + Clone + 'static,
{
    type Value = M;

    fn encode(value: &M) -> Vec<u8> {
        value.encode_to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<M, CodecError> {
        M::decode(bytes).map_err(|source| CodecError::Decode {
            type_name: std::any::type_name::<M>(),
            source,
        })
    }
}

pub type DepositCodec = ProtoCodec<Deposit>;
pub type DepositHistoryCodec = ProtoCodec<DepositHistory>;
pub type FlagEventCodec = ProtoCodec<FlagEvent>;
pub type FlagValueCodec = ProtoCodec<FlagValue>;
