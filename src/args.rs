use std::env;
use std::path::PathBuf;
use std::process::exit;

#[derive(Default)]
pub struct Args {
    /// dump the AST and stop
    pub ast: bool,
    /// dump the TAC and stop
    pub tac: bool,
    /// write assembly to stdout instead of `<file>.s`
    pub console: bool,
    /// link an executable with gcc
    pub exe: bool,
    pub lib_path: Option<String>,
    pub target: Option<String>,
    pub inputs: Vec<PathBuf>,
}

impl Args {
    pub fn parse() -> Self {
        let mut args = Self::default();

        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--ast" => args.ast = true,
                "--tac" => args.tac = true,
                "--console" => args.console = true,
                "--exe" => args.exe = true,
                s if s.starts_with("--lib-path=") => {
                    args.lib_path = Some(s["--lib-path=".len()..].to_owned());
                }
                s if s.starts_with("--target=") => {
                    args.target = Some(s["--target=".len()..].to_owned());
                }
                "-h" | "--help" => Self::usage(),
                s if s.starts_with('-') => {
                    eprintln!("unknown option '{s}'\n");
                    Self::usage();
                }
                _ => args.inputs.push(PathBuf::from(arg)),
            }
        }

        if args.inputs.is_empty() {
            Self::usage();
        }
        args
    }

    fn usage() -> ! {
        let cmd0 = env::args().next().unwrap_or_else(|| "snuplc".to_owned());
        print!(
            "SnuPL/2 compiler\n\n\
             Usage: {cmd0} [OPTIONS] FILE...\n\n\
             Options:\n\
             \x20 -h, --help             Show this message\n\
             \x20     --target=<key>     Select the target (amd64, default)\n\
             \x20     --lib-path=<dir>   Runtime library path for linking\n\
             \x20     --console          Write assembly to stdout\n\
             \x20     --exe              Link an executable with gcc\n\
             \x20     --ast              Dump the AST and stop\n\
             \x20     --tac              Dump the TAC IR and stop\n"
        );
        exit(0)
    }
}
