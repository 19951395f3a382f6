fn main() -> std::process::ExitCode {
    clinicsync_lib::run()
}
