/// Delegates to nih_plug_xtask for the `bundle` subcommand:
///
///   cargo xtask bundle biased-delay --release
///
/// Produces `target/bundled/Biased Delay.vst3` and `Biased Delay.clap`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
