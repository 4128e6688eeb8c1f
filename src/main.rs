fn main() {
  mplayer_ctl::run()
}
