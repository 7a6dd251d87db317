use bytes::BytesMut;
use serde::Serialize;
use tracing::debug;

use lipc_client::{build_property_message, PropertyTypeTag};
use lipc_wire::{encode_message, Message, Value};

use crate::cmd::MessageArgs;
use crate::exit::{lipc_error, wire_error, CliError, CliResult, SUCCESS};
use crate::output::{hex, print_fields, print_json, print_pretty, print_raw, OutputFormat};

/// Serial stamped on the message when its bytes are shown.
const PREVIEW_SERIAL: u32 = 1;

#[derive(Serialize)]
struct MessageOutput {
    message_type: String,
    flags: u8,
    path: Option<String>,
    interface: Option<String>,
    member: Option<String>,
    destination: Option<String>,
    signature: Option<String>,
    body: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<String>,
}

impl MessageOutput {
    fn new(msg: &Message, encoded: Option<&[u8]>) -> Self {
        Self {
            message_type: msg.message_type.to_string(),
            flags: msg.flags.bits(),
            path: msg.path().map(str::to_string),
            interface: msg.interface().map(str::to_string),
            member: msg.member().map(str::to_string),
            destination: msg.destination().map(str::to_string),
            signature: msg.signature().map(str::to_string),
            body: msg.body.iter().map(Value::to_string).collect(),
            bytes: encoded.map(hex),
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        let mut fields = vec![
            ("type", self.message_type.clone()),
            ("flags", format!("{:#04x}", self.flags)),
            ("path", text(&self.path)),
            ("interface", text(&self.interface)),
            ("member", text(&self.member)),
            ("destination", text(&self.destination)),
            ("signature", text(&self.signature)),
            ("body", self.body.join(", ")),
        ];
        if let Some(bytes) = &self.bytes {
            fields.push(("bytes", bytes.clone()));
        }
        fields
    }
}

pub fn run(args: MessageArgs, format: OutputFormat) -> CliResult<i32> {
    let tag = PropertyTypeTag::from(args.ty);
    let value = args
        .value
        .as_deref()
        .map(|raw| parse_value(tag, raw))
        .transpose()?;

    let mut msg = build_property_message(
        args.kind.into(),
        &args.service,
        &args.property,
        tag,
        value,
    )
    .map_err(|err| lipc_error("failed to build message", err))?;
    debug!(member = msg.member().unwrap_or_default(), "message built");

    let encoded = if args.hex || matches!(format, OutputFormat::Raw) {
        msg.serial = PREVIEW_SERIAL;
        let mut buf = BytesMut::new();
        encode_message(&msg, &mut buf).map_err(|err| wire_error("failed to encode message", err))?;
        Some(buf)
    } else {
        None
    };

    let out = MessageOutput::new(&msg, encoded.as_deref().filter(|_| args.hex));
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_fields(&out.fields()),
        OutputFormat::Pretty => print_pretty(&out.fields()),
        OutputFormat::Raw => {
            if let Some(buf) = &encoded {
                print_raw(buf);
            }
        }
    }
    Ok(SUCCESS)
}

fn parse_value(tag: PropertyTypeTag, raw: &str) -> CliResult<Value> {
    match tag {
        PropertyTypeTag::Integer => raw
            .trim()
            .parse::<i32>()
            .map(Value::Int32)
            .map_err(|err| CliError::data(format!("invalid integer value '{raw}': {err}"))),
        PropertyTypeTag::String => Ok(Value::from(raw)),
    }
}
