use clap::{Args, Subcommand};

/// Available esm subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add packages to the import map
    ///
    /// Resolves each package and its dependencies through the CDN and binds
    /// them in the import map of the HTML document, creating the document
    /// when it does not exist yet.
    Add(AddArgs),

    /// Re-resolve the import map
    ///
    /// Rebuilds every CDN binding from the packages bound directly in
    /// "imports", dropping scopes that are no longer needed. Bindings that
    /// do not point at the CDN are kept as they are.
    Tidy(TidyArgs),

    /// Print the URL a specifier resolves to
    Resolve(ResolveArgs),

    /// Print the CDN metadata of a package module
    Info(InfoArgs),
}

/// Arguments for the add command
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Packages to add
    ///
    /// Examples:
    ///   esm add react@19 react-dom@19
    ///   esm add jsr:@std/path
    ///   esm add owner/repo#main
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Print the updated import map instead of writing the document
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the tidy command
#[derive(Args, Debug)]
pub struct TidyArgs {
    /// Print the updated import map instead of writing the document
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Bare specifier to resolve, e.g. react-dom/client
    #[arg(value_name = "SPECIFIER")]
    pub specifier: String,

    /// URL of the importing module; selects the matching scope
    #[arg(long, value_name = "URL")]
    pub referrer: Option<String>,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Package to inspect, e.g. react@19 or jsr:@std/path
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Module inside the package, e.g. client for react-dom/client
    #[arg(long, value_name = "PATH")]
    pub subpath: Option<String>,

    /// Print the raw metadata document as JSON
    #[arg(long)]
    pub json: bool,
}
