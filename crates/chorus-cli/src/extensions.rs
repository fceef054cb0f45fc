//! Extensions shipped with the CLI.

use chorus_ai::{Extension, FieldSpec, ParameterSchema};
use uuid::Uuid;

pub const UUID_GENERATOR: &str = "@official/uuid-generator";
pub const WEATHER: &str = "@official/weather";

fn generate_uuid(version: &str) -> String {
    match version {
        "v6" => {
            let seed = Uuid::new_v4().into_bytes();
            let node = [seed[0], seed[1], seed[2], seed[3], seed[4], seed[5]];
            Uuid::now_v6(&node).to_string()
        }
        "v7" => Uuid::now_v7().to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

pub fn uuid_generator() -> Extension {
    Extension::builder(UUID_GENERATOR)
        .name("UUID Generator Tool")
        .description("Generate UUIDs on demand")
        .tag("tools")
        .tag("generator")
        .schema(ParameterSchema::new().field(
            FieldSpec::enumeration("version", &["auto", "v4", "v6", "v7"])
                .default_value("auto")
                .describe("Force a UUID version, or let the model choose"),
        ))
        .tool(
            "uuid-generator",
            "use this tool if user want to generate uuid",
            ParameterSchema::new().field(
                FieldSpec::enumeration("version", &["v4", "v6", "v7"]).default_value("v4"),
            ),
            |params, input| async move {
                let forced = params.get("version").and_then(|v| v.as_str()).unwrap_or("auto");
                let version = match forced {
                    "auto" => input.get("version").and_then(|v| v.as_str()).unwrap_or("v4"),
                    other => other,
                };
                Ok::<_, String>(generate_uuid(version))
            },
        )
        .build()
}

pub fn weather() -> Extension {
    Extension::builder(WEATHER)
        .name("Realtime Weather")
        .description("Get realtime weather")
        .tag("tools")
        .tool(
            "weather",
            "use this tool if user want to get realtime weather",
            ParameterSchema::new().field(FieldSpec::string("location").default_value("jakarta")),
            |_params, input| async move {
                let location = input.get("location").and_then(|v| v.as_str()).unwrap_or("jakarta");
                Ok::<_, String>(format!("Weather in {location} is sunny"))
            },
        )
        .build()
}

pub fn shipped() -> Vec<Extension> {
    vec![uuid_generator(), weather()]
}
