extern crate prost_build;

fn main() -> std::io::Result<()> {
    for proto in &["api", "base", "value"] {
        println!("cargo:rerun-if-changed=prototypes/{}.proto", proto);
    }

    prost_build::Config::new().compile_protos(
        &[
            "prototypes/api.proto",
            "prototypes/base.proto",
            "prototypes/value.proto"
        ],
        &["prototypes/"])
}
