//! Human-readable packet rendering

use oscwire_core::{Argument, Message, Packet};

pub fn format_argument(arg: &Argument) -> String {
    match arg {
        Argument::Int(v) => v.to_string(),
        Argument::Float(v) => format!("{:?}", v),
        Argument::Str(v) => format!("{:?}", v),
        Argument::Blob(v) => {
            let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
            format!("<{}>", hex)
        }
        Argument::Int64(v) => format!("{}h", v),
        Argument::Float64(v) => format!("{:?}d", v),
        Argument::UInt64(v) => format!("{}t", v),
    }
}

/// `/address ,types arg arg ...`
pub fn format_message(message: &Message) -> String {
    let mut line = format!("{} {}", message.address, message.types());
    for arg in &message.args {
        line.push(' ');
        line.push_str(&format_argument(arg));
    }
    line
}

/// One line per message; bundle contents are indented under their header
pub fn format_packet(packet: &Packet) -> Vec<String> {
    let mut lines = Vec::new();
    push_packet(packet, 0, &mut lines);
    lines
}

fn push_packet(packet: &Packet, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match packet {
        Packet::Message(message) => lines.push(format!("{}{}", indent, format_message(message))),
        Packet::Bundle(bundle) => {
            let when = match bundle.timetag.scheduled_at() {
                Some(ms) => format!("@{}ms", ms),
                None => "immediate".to_string(),
            };
            lines.push(format!("{}#bundle {} ({} elements)", indent, when, bundle.len()));
            for element in &bundle.elements {
                push_packet(element, depth + 1, lines);
            }
        }
    }
}
