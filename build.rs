fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only the espidf target has an ESP-IDF sysenv to forward; host builds
    // (tests, simulation) skip it.
    #[cfg(feature = "espidf")]
    {
        if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
            embuild::espidf::sysenv::output();
        }
    }
}
