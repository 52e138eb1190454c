use login_guard::settings::*;

fn main() {
    // Load settings from the default location
    let project_settings = parse_settings(None).unwrap();
    println!("Loaded settings: {:?}", project_settings);
    println!("Guard options: {:?}", project_settings.guard.options());

    // Attempt to load from a missing path (expected to fail)
    let is_err = parse_settings(Some("settings/missing.toml")).is_err();
    println!("Error on missing path: {:?}", is_err);

    // $ LOGIN_GUARD_GUARD__BLOCKING=disabled cargo run --bin settings_demo -- --settings=settings/dev.toml serve
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref()).unwrap();
    println!("Loaded settings: {:?}", project_settings);
}
