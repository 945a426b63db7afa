use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Generating Greeter service types...");

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let out_dir = manifest_dir.join("src/generated");

    let proto_file = manifest_dir.join("proto/helloworld.proto");
    let proto_folder = manifest_dir.join("proto");

    if !out_dir.exists() {
        fs::create_dir_all(&out_dir)?;
    }

    // The client stub is hand written on top of `tonic::client::Grpc`,
    // only messages and the server router are generated.
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(false)
        .file_descriptor_set_path(out_dir.join("helloworld_descriptor.bin"))
        .out_dir(&out_dir)
        .compile_protos(&[proto_file], &[proto_folder])?;

    println!("Done! Generated files are in src/generated");

    Ok(())
}
