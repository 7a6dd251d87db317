use clap::{Args, Subcommand, ValueEnum};

use lipc_client::{PropertyRequestKind, PropertyTypeTag};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod message;
pub mod status;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a property call message and print it.
    Message(MessageArgs),
    /// Look up LIPC status codes.
    Status(StatusArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Message(args) => message::run(args, format),
        Command::Status(args) => status::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum KindArg {
    Get,
    Set,
}

impl From<KindArg> for PropertyRequestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Get => PropertyRequestKind::Get,
            KindArg::Set => PropertyRequestKind::Set,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum TypeArg {
    Int,
    Str,
}

impl From<TypeArg> for PropertyTypeTag {
    fn from(ty: TypeArg) -> Self {
        match ty {
            TypeArg::Int => PropertyTypeTag::Integer,
            TypeArg::Str => PropertyTypeTag::String,
        }
    }
}

#[derive(Args, Debug)]
pub struct MessageArgs {
    /// Read or write the property.
    pub kind: KindArg,
    /// Service bus name, e.g. com.lab126.powerd.
    pub service: String,
    /// Property name, e.g. flIntensity.
    pub property: String,
    /// Property value type.
    #[arg(long = "type", value_name = "TYPE")]
    pub ty: TypeArg,
    /// Value to write (set only).
    #[arg(long, allow_hyphen_values = true)]
    pub value: Option<String>,
    /// Also print the encoded message bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Status code, decimal or 0x-prefixed hex. Lists the table when omitted.
    pub code: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
