use hls_range::driver;
use hls_utils::HlsResult;

fn main() -> HlsResult<()> {
    driver::run_analysis()
}
