fn main() {
    println!("cargo:rerun-if-env-changed=FW_VERSION");

    // Bake an explicit firmware tag into the image when one is supplied.
    // Without it the library falls back to "FW-V:<package version>".
    if let Ok(tag) = std::env::var("FW_VERSION") {
        if tag.trim().is_empty() {
            println!("cargo:warning=FW_VERSION is set but empty; using package version");
        } else {
            println!("cargo:rustc-env=OTA_AGENT_FW_TAG={}", tag.trim());
        }
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
