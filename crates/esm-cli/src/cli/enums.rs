use clap::ValueEnum;
use esm_importmap::Target;

/// ECMAScript target version
///
/// The CDN compiles every module once per target; later targets keep more
/// modern syntax and need newer browsers.
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum EsTarget {
    #[value(name = "es2015")]
    Es2015,
    #[value(name = "es2016")]
    Es2016,
    #[value(name = "es2017")]
    Es2017,
    #[value(name = "es2018")]
    Es2018,
    #[value(name = "es2019")]
    Es2019,
    #[value(name = "es2020")]
    Es2020,
    #[value(name = "es2021")]
    Es2021,
    /// Default build of esm.sh
    #[value(name = "es2022")]
    Es2022,
    #[value(name = "es2023")]
    Es2023,
    /// Default for new import maps
    #[value(name = "es2024")]
    Es2024,
    /// Latest features, no transpilation
    #[value(name = "esnext")]
    EsNext,
}

impl From<EsTarget> for Target {
    fn from(target: EsTarget) -> Self {
        match target {
            EsTarget::Es2015 => Target::Es2015,
            EsTarget::Es2016 => Target::Es2016,
            EsTarget::Es2017 => Target::Es2017,
            EsTarget::Es2018 => Target::Es2018,
            EsTarget::Es2019 => Target::Es2019,
            EsTarget::Es2020 => Target::Es2020,
            EsTarget::Es2021 => Target::Es2021,
            EsTarget::Es2022 => Target::Es2022,
            EsTarget::Es2023 => Target::Es2023,
            EsTarget::Es2024 => Target::Es2024,
            EsTarget::EsNext => Target::EsNext,
        }
    }
}
