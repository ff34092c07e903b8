fn main() -> Result<(), Box<dyn std::error::Error>> {
    // protoc is not installed in this environment; use the vendored binary.
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc);
    tonic_build::compile_protos("proto/raft.proto")?;
    Ok(())
}
