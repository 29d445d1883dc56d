fn main() {
    dealdesk_lib::run()
}
