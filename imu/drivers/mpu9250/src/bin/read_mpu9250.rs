use linux_mpu9250::{FullScale, ImuDriver, Mpu9250};
use std::io;
use std::thread;
use std::time::Duration;

//* run by `cargo run --bin read_mpu9250 -- /dev/i2c-1` */

fn main() -> io::Result<()> {
    let bus = std::env::args().nth(1).unwrap_or_else(|| "/dev/i2c-1".to_string());
    let scale = FullScale::default();

    let mut imu = Mpu9250::new(&bus, scale)
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
    println!("Successfully connected to {}", bus);

    imu.init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let sensitivity = imu
        .init_magnetometer()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    println!("Magnetometer sensitivity: {}", sensitivity);

    loop {
        match imu.data_ready() {
            Ok(true) => match imu.read_raw() {
                Ok(raw) => {
                    let a = raw.accel.map(|c| c as f32 * scale.accel.resolution());
                    let g = raw.gyro.map(|c| c as f32 * scale.gyro.resolution());
                    let m = raw
                        .mag
                        .unwrap_or_default()
                        .map(|c| c as f32 * scale.mag.resolution());
                    println!(
                        "acc:  x: {: >10.3} y: {: >10.3} z: {: >10.3}\n\
                         gyro: x: {: >10.3} y: {: >10.3} z: {: >10.3}\n\
                         mag:  x: {: >10.3} y: {: >10.3} z: {: >10.3}\n",
                        a[0], a[1], a[2], g[0], g[1], g[2], m[0], m[1], m[2],
                    );
                }
                Err(e) => eprintln!("Error reading from IMU: {}", e),
            },
            Ok(false) => {}
            Err(e) => eprintln!("Error polling IMU status: {}", e),
        }

        thread::sleep(Duration::from_millis(10));
    }
}
