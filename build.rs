fn main() {
    // ESP-IDF link args and sysenv are only needed for firmware builds;
    // host test builds skip embuild entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
