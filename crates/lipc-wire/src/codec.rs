use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::error::{Result, WireError};
use crate::header::{Flags, HeaderField, MessageType, PROTOCOL_VERSION};
use crate::message::Message;
use crate::value::{ObjectPath, Signature, Value, BASIC_TYPE_CODES, MAX_VARIANT_DEPTH};

/// Fixed header (12 bytes) plus the header-field array length word.
pub const FIXED_HEADER_SIZE: usize = 16;

/// Largest message the bus protocol allows: 128 MiB.
pub const MAX_MESSAGE_SIZE: usize = 128 * 1024 * 1024;

const LITTLE_ENDIAN: u8 = b'l';
const BIG_ENDIAN: u8 = b'B';

/// Encode a message into the wire format, little-endian.
///
/// Wire layout:
/// ```text
/// ┌─────┬──────┬───────┬─────────┬──────────┬────────┬───────────┬─────┬──────┐
/// │ 'l' │ type │ flags │ version │ body len │ serial │ a(yv) hdr │ pad │ body │
/// │ 1B  │ 1B   │ 1B    │ 1B (=1) │ 4B       │ 4B     │ fields    │ → 8 │      │
/// └─────┴──────┴───────┴─────────┴──────────┴────────┴───────────┴─────┴──────┘
/// ```
///
/// The message must be valid and carry a non-zero serial.
pub fn encode_message(msg: &Message, dst: &mut BytesMut) -> Result<()> {
    if msg.serial == 0 {
        return Err(WireError::InvalidMessage(
            "serial must be assigned before encoding".to_string(),
        ));
    }
    msg.validate()?;
    if msg.opaque_body.is_some() {
        return Err(WireError::InvalidMessage(
            "cannot re-encode an undecoded body".to_string(),
        ));
    }

    let mut out = Marshaller::default();
    out.buf.put_u8(LITTLE_ENDIAN);
    out.buf.put_u8(msg.message_type as u8);
    out.buf.put_u8(msg.flags.bits());
    out.buf.put_u8(PROTOCOL_VERSION);
    out.buf.put_u32_le(0); // body length, patched below
    out.buf.put_u32_le(msg.serial);

    let fields_len_pos = out.buf.len();
    out.buf.put_u32_le(0);
    out.pad(8);
    let fields_start = out.buf.len();
    for (field, value) in &msg.headers {
        out.pad(8);
        out.buf.put_u8(field.code());
        out.put_value(&Value::Variant(Box::new(value.clone())))?;
    }
    let fields_len = out.buf.len() - fields_start;
    out.patch_u32(fields_len_pos, fields_len as u32);
    out.pad(8);

    let body_start = out.buf.len();
    for value in &msg.body {
        out.put_value(value)?;
    }
    let body_len = out.buf.len() - body_start;
    out.patch_u32(4, body_len as u32);

    if out.buf.len() > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: out.buf.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    dst.reserve(out.buf.len());
    dst.put_slice(&out.buf);
    Ok(())
}

/// Decode one message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete message yet.
/// Once the length is known the message bytes are consumed, so a message
/// that fails to parse does not desynchronize the stream.
pub fn decode_message(src: &mut BytesMut, max_size: usize) -> Result<Option<Message>> {
    if src.len() < FIXED_HEADER_SIZE {
        return Ok(None);
    }

    let big_endian = match src[0] {
        LITTLE_ENDIAN => false,
        BIG_ENDIAN => true,
        other => return Err(WireError::InvalidEndianness(other)),
    };
    if src[3] != PROTOCOL_VERSION {
        return Err(WireError::UnsupportedVersion(src[3]));
    }

    let body_len = read_u32_at(src, 4, big_endian) as usize;
    let fields_len = read_u32_at(src, 12, big_endian) as usize;
    let header_len = align_up(FIXED_HEADER_SIZE + fields_len, 8);
    let total = header_len + body_len;
    if total > max_size {
        return Err(WireError::MessageTooLarge {
            size: total,
            max: max_size,
        });
    }
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    let frame = src.split_to(total).freeze();
    parse_message(&frame, big_endian, header_len).map(Some)
}

fn parse_message(frame: &[u8], big_endian: bool, header_len: usize) -> Result<Message> {
    let mut msg = Message::new(MessageType::from_u8(frame[1])?);
    msg.flags = Flags::from_bits(frame[2]);

    let mut rd = Unmarshaller {
        data: frame,
        pos: 8,
        big_endian,
        depth: 0,
    };
    msg.serial = rd.u32("serial")?;
    if msg.serial == 0 {
        return Err(WireError::InvalidMessage("serial must not be zero".to_string()));
    }

    let fields_len = rd.u32("header field array length")? as usize;
    rd.align(8)?;
    let fields_end = rd.pos + fields_len;
    while rd.pos < fields_end {
        rd.align(8)?;
        let code = rd.u8("header field code")?;
        let value = rd.variant()?;
        match HeaderField::from_code(code) {
            Some(field) => {
                msg.headers.insert(field, value);
            }
            None => trace!(code, "ignoring unknown header field"),
        }
    }
    if rd.pos != fields_end {
        return Err(WireError::InvalidMessage(
            "header field array overruns its length".to_string(),
        ));
    }
    rd.align(8)?;
    debug_assert_eq!(rd.pos, header_len);

    let signature = match msg.headers.get(&HeaderField::Signature) {
        Some(Value::Signature(sig)) => sig.clone(),
        _ => Signature::default(),
    };
    if signature.is_basic_sequence() {
        for code in signature.as_str().chars() {
            msg.body.push(rd.value(code)?);
        }
        if rd.pos != frame.len() {
            return Err(WireError::InvalidMessage(format!(
                "body length {} does not match signature '{signature}'",
                frame.len() - header_len
            )));
        }
    } else {
        trace!(%signature, "leaving container body undecoded");
        msg.opaque_body = Some(signature);
    }

    msg.validate()?;
    Ok(msg)
}

fn align_up(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

fn read_u32_at(src: &[u8], at: usize, big_endian: bool) -> u32 {
    let raw = [src[at], src[at + 1], src[at + 2], src[at + 3]];
    if big_endian {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    }
}

/// Writes values at offsets relative to the message start.
#[derive(Default)]
struct Marshaller {
    buf: BytesMut,
}

impl Marshaller {
    fn pad(&mut self, align: usize) {
        let target = align_up(self.buf.len(), align);
        self.buf.put_bytes(0, target - self.buf.len());
    }

    fn patch_u32(&mut self, at: usize, value: u32) {
        self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_str(&mut self, s: &str) -> Result<()> {
        let len = u32::try_from(s.len()).map_err(|_| WireError::MessageTooLarge {
            size: s.len(),
            max: MAX_MESSAGE_SIZE,
        })?;
        self.pad(4);
        self.buf.put_u32_le(len);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    fn put_signature(&mut self, s: &str) -> Result<()> {
        let len = u8::try_from(s.len()).map_err(|_| {
            WireError::InvalidMessage(format!("signature too long ({} bytes)", s.len()))
        })?;
        self.buf.put_u8(len);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    fn put_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Byte(v) => self.buf.put_u8(*v),
            Value::Bool(v) => {
                self.pad(4);
                self.buf.put_u32_le(u32::from(*v));
            }
            Value::Int32(v) => {
                self.pad(4);
                self.buf.put_i32_le(*v);
            }
            Value::UInt32(v) => {
                self.pad(4);
                self.buf.put_u32_le(*v);
            }
            Value::Int64(v) => {
                self.pad(8);
                self.buf.put_i64_le(*v);
            }
            Value::UInt64(v) => {
                self.pad(8);
                self.buf.put_u64_le(*v);
            }
            Value::Double(v) => {
                self.pad(8);
                self.buf.put_f64_le(*v);
            }
            Value::Str(s) => self.put_str(s)?,
            Value::ObjectPath(p) => self.put_str(p.as_str())?,
            Value::Signature(g) => self.put_signature(g.as_str())?,
            Value::Variant(inner) => {
                let mut code = [0u8; 4];
                self.put_signature(inner.type_code().encode_utf8(&mut code))?;
                self.put_value(inner)?;
            }
        }
        Ok(())
    }
}

/// Reads values from a complete message frame.
struct Unmarshaller<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
    /// Variants currently open around `pos`.
    depth: usize,
}

impl<'a> Unmarshaller<'a> {
    fn align(&mut self, align: usize) -> Result<()> {
        let target = align_up(self.pos, align);
        let padding = self.take(target - self.pos, "padding")?;
        if padding.iter().any(|b| *b != 0) {
            return Err(WireError::InvalidMessage("non-zero padding".to_string()));
        }
        Ok(())
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(WireError::Truncated(what))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn fixed<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        self.align(N)?;
        let mut raw = [0u8; N];
        raw.copy_from_slice(self.take(N, what)?);
        if self.big_endian {
            raw.reverse();
        }
        Ok(raw)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        self.fixed::<4>(what).map(u32::from_le_bytes)
    }

    fn u64(&mut self, what: &'static str) -> Result<u64> {
        self.fixed::<8>(what).map(u64::from_le_bytes)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32("string length")? as usize;
        let bytes = self.take(len, "string")?;
        self.nul_terminator()?;
        to_utf8(bytes)
    }

    fn signature(&mut self) -> Result<Signature> {
        let len = self.u8("signature length")? as usize;
        let bytes = self.take(len, "signature")?;
        self.nul_terminator()?;
        Signature::new(to_utf8(bytes)?)
    }

    fn nul_terminator(&mut self) -> Result<()> {
        match self.take(1, "string terminator")? {
            [0] => Ok(()),
            _ => Err(WireError::MalformedString("missing NUL terminator")),
        }
    }

    /// Reads a variant and returns the value it wraps.
    fn variant(&mut self) -> Result<Value> {
        if self.depth >= MAX_VARIANT_DEPTH {
            return Err(WireError::InvalidMessage(format!(
                "variants nested deeper than {MAX_VARIANT_DEPTH}"
            )));
        }
        self.depth += 1;
        let value = self.variant_contents();
        self.depth -= 1;
        value
    }

    fn variant_contents(&mut self) -> Result<Value> {
        let signature = self.signature()?;
        let mut codes = signature.as_str().chars();
        match (codes.next(), codes.next()) {
            (Some(code), None) if BASIC_TYPE_CODES.contains(code) => self.value(code),
            _ => Err(WireError::UnsupportedSignature(signature.to_string())),
        }
    }

    fn value(&mut self, code: char) -> Result<Value> {
        let value = match code {
            'y' => Value::Byte(self.u8("byte")?),
            'b' => match self.u32("boolean")? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(WireError::InvalidMessage(format!(
                        "invalid boolean value {other}"
                    )))
                }
            },
            'i' => Value::Int32(self.u32("int32")? as i32),
            'u' => Value::UInt32(self.u32("uint32")?),
            'x' => Value::Int64(self.u64("int64")? as i64),
            't' => Value::UInt64(self.u64("uint64")?),
            'd' => Value::Double(f64::from_bits(self.u64("double")?)),
            's' => Value::Str(self.string()?),
            'o' => Value::ObjectPath(ObjectPath::new(self.string()?)?),
            'g' => Value::Signature(self.signature()?),
            'v' => Value::Variant(Box::new(self.variant()?)),
            other => return Err(WireError::UnsupportedSignature(other.to_string())),
        };
        Ok(value)
    }
}

fn to_utf8(bytes: &[u8]) -> Result<String> {
    let text =
        std::str::from_utf8(bytes).map_err(|_| WireError::MalformedString("invalid UTF-8"))?;
    if text.contains('\0') {
        return Err(WireError::MalformedString("interior NUL"));
    }
    Ok(text.to_string())
}
