// Packaging assets under OUT_DIR: man pages in `man/`, completion scripts
// in `completions/`.

use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs depends only on clap and clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        panic!("OUT_DIR is set by cargo for build scripts");
    };
    let out_dir = Path::new(&out_dir);
    let mut cmd = cli::Cli::command();

    let man_dir = out_dir.join("man");
    create_dir(&man_dir);
    write_man_page(&cmd, &man_dir);

    let completions_dir = out_dir.join("completions");
    create_dir(&completions_dir);
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        if let Err(e) = clap_complete::generate_to(shell, &mut cmd, "estatedesk", &completions_dir) {
            panic!("failed to generate {shell} completions: {e}");
        }
    }
}

fn create_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        panic!("failed to create {}: {e}", dir.display());
    }
}

/// `estatedesk.1`, `estatedesk-add.1`, `estatedesk-config-init.1`, ...
fn write_man_page(cmd: &clap::Command, dir: &Path) {
    let name = cmd.get_name().to_owned();
    let mut page = Vec::new();
    if let Err(e) = clap_mangen::Man::new(cmd.clone()).render(&mut page) {
        panic!("failed to render man page for `{name}`: {e}");
    }
    let path = dir.join(format!("{name}.1"));
    if let Err(e) = fs::write(&path, page) {
        panic!("failed to write {}: {e}", path.display());
    }

    for sub in cmd.get_subcommands().filter(|sub| !sub.is_hide_set()) {
        let qualified = sub.clone().name(format!("{name}-{}", sub.get_name()));
        write_man_page(&qualified, dir);
    }
}
