//! 色温换算

use smart_leds::RGB8;

/// 色温（开尔文）转 RGB
///
/// 使用 Tanner Helland 近似公式，支持 1000K ~ 40000K，超出范围会被钳位。
/// 返回值可以直接作为逐通道乘法校正因子（255 = 100%）。
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn kelvin_to_rgb(kelvin: u16) -> RGB8 {
    let temp = (f32::from(kelvin) / 100.0).clamp(10.0, 400.0);

    let red = if temp <= 66.0 {
        255.0
    } else {
        (329.698_73 * (temp - 60.0).powf(-0.133_204_76)).clamp(0.0, 255.0)
    };

    let green = if temp <= 66.0 {
        99.470_8 * temp.ln() - 161.119_57
    } else {
        288.122_17 * (temp - 60.0).powf(-0.075_514_85)
    }
    .clamp(0.0, 255.0);

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        (138.517_73 * (temp - 10.0).ln() - 305.044_8).clamp(0.0, 255.0)
    };

    RGB8::new(red as u8, green as u8, blue as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_daylight_is_near_white() {
        let color = kelvin_to_rgb(6600);
        assert_eq!(color.r, 255);
        assert!(color.g > 240, "green = {}", color.g);
        assert_eq!(color.b, 255);
    }

    #[test]
    fn test_kelvin_warm_has_no_blue() {
        let color = kelvin_to_rgb(1500);
        assert_eq!(color.r, 255);
        assert_eq!(color.b, 0);
        assert!(color.g < 150);
    }

    #[test]
    fn test_kelvin_cold_is_bluish() {
        let color = kelvin_to_rgb(20000);
        assert_eq!(color.b, 255);
        assert!(color.r < 200);
    }

    #[test]
    fn test_kelvin_clamps_out_of_range() {
        assert_eq!(kelvin_to_rgb(0), kelvin_to_rgb(1000));
        assert_eq!(kelvin_to_rgb(u16::MAX), kelvin_to_rgb(40000));
    }
}
