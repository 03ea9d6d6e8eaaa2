fn main() {
    gamevault_lib::run()
}
