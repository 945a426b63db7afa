//! # Marshallers
//!
//! A [`Marshaller`] is a serialize/parse pair for one message type. The stub never
//! touches the wire format itself: it hands a pair of marshallers to
//! [`MarshallerCodec`], which plugs them into `tonic` as a regular
//! `tonic::codec::Codec`.
//!
//! ## How it works
//!
//! 1. **Encoder**: calls `serialize` on the outgoing message and copies the bytes
//!    into the frame buffer provided by `tonic`.
//! 2. **Decoder**: drains the incoming frame and calls `parse` on it. Parse
//!    failures are reported as `Status::internal`, as any other codec does.
use bytes::{Buf, BufMut};
use prost::Message;
use std::fmt;
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// Serialize/parse hooks for a message type `T`.
pub struct Marshaller<T> {
    serialize: fn(&T) -> Vec<u8>,
    parse: fn(&[u8]) -> Result<T, prost::DecodeError>,
}

impl<T> Marshaller<T> {
    /// Creates a marshaller from a pair of plain functions.
    pub fn new(
        serialize: fn(&T) -> Vec<u8>,
        parse: fn(&[u8]) -> Result<T, prost::DecodeError>,
    ) -> Self {
        Self { serialize, parse }
    }

    pub fn serialize(&self, message: &T) -> Vec<u8> {
        (self.serialize)(message)
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<T, prost::DecodeError> {
        (self.parse)(bytes)
    }
}

impl<T> Marshaller<T>
where
    T: Message + Default,
{
    /// Marshaller backed by the message's own protobuf encoding.
    pub fn prost() -> Self {
        Self::new(encode_message::<T>, decode_message::<T>)
    }
}

fn encode_message<T: Message>(message: &T) -> Vec<u8> {
    message.encode_to_vec()
}

fn decode_message<T: Message + Default>(bytes: &[u8]) -> Result<T, prost::DecodeError> {
    T::decode(bytes)
}

// Manual impls: a derive would require `T: Clone`/`T: Debug`, but only fn pointers are stored.
impl<T> Clone for Marshaller<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Marshaller<T> {}

impl<T> fmt::Debug for Marshaller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaller")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// A `tonic` codec made of a request marshaller and a response marshaller.
#[derive(Debug)]
pub struct MarshallerCodec<Req, Res> {
    request: Marshaller<Req>,
    response: Marshaller<Res>,
}

impl<Req, Res> MarshallerCodec<Req, Res> {
    pub fn new(request: Marshaller<Req>, response: Marshaller<Res>) -> Self {
        Self { request, response }
    }
}

impl<Req, Res> Codec for MarshallerCodec<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Encode = Req;
    type Decode = Res;

    type Encoder = MarshallerEncoder<Req>;
    type Decoder = MarshallerDecoder<Res>;

    fn encoder(&mut self) -> Self::Encoder {
        MarshallerEncoder(self.request)
    }

    fn decoder(&mut self) -> Self::Decoder {
        MarshallerDecoder(self.response)
    }
}

/// Writes serialized messages into the outgoing frame.
#[derive(Debug)]
pub struct MarshallerEncoder<T>(Marshaller<T>);

impl<T> Encoder for MarshallerEncoder<T> {
    type Item = T;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put_slice(&self.0.serialize(&item));
        Ok(())
    }
}

/// Parses a complete incoming frame into a message.
#[derive(Debug)]
pub struct MarshallerDecoder<T>(Marshaller<T>);

impl<T> Decoder for MarshallerDecoder<T> {
    type Item = T;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let bytes = src.copy_to_bytes(src.remaining());

        let message = self
            .0
            .parse(&bytes)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;

        Ok(Some(message))
    }
}
