// Plant Monitor Plugin - Build Script
// Generates permission schema files for the Tauri capability system

const COMMANDS: &[&str] = &[
    // Device registry commands
    "list_devices",
    "get_device",
    "add_device",
    "remove_device",
    // Telemetry commands
    "open_telemetry",
    "close_telemetry",
    "get_telemetry",
    "get_session_state",
    // Control commands
    "send_command",
    "ping_device",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();

    println!("cargo:rerun-if-changed=permissions/");
    println!("cargo:rerun-if-changed=build.rs");
}
