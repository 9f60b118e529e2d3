fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/event.proto");

    // Prefer a vendored protoc to avoid requiring a system installation.
    let protoc_path = protoc_bin_vendored::protoc_bin_path()
        .map_err(|e| format!("failed to locate vendored protoc: {e}"))?;
    // SAFETY: build scripts are single-threaded; nothing else reads the environment concurrently.
    unsafe {
        std::env::set_var("PROTOC", protoc_path);
    }

    // The server half is only used by the in-process test hub.
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/event.proto"], &["proto/"])?;
    Ok(())
}
