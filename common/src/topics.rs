pub const THINGSBOARD_PORT: u16 = 1883;

pub const TOPIC_TELEMETRY_SELF: &str = "v1/devices/me/telemetry";
pub const TOPIC_DEVICE_PROVISION: &str = "v1/gateway/connect";
pub const TOPIC_DEVICE_ATTRIBUTES: &str = "v1/gateway/attributes";
pub const TOPIC_GATEWAY_TELEMETRY: &str = "v1/gateway/telemetry";
