use stm32g0xx_hal::dma::C1;
use stm32g0xx_hal::gpio::gpioa::{PA2, PA3};
use stm32g0xx_hal::gpio::gpiob::{PB3, PB5, PB6, PB7, PB8};
use stm32g0xx_hal::gpio::{DefaultMode, Output, PushPull};
use stm32g0xx_hal::rcc::{Config, PllConfig, Rcc, RccExt};
use stm32g0xx_hal::serial::{FullConfig, InvalidConfig, Serial, SerialExt};
use stm32g0xx_hal::spi::{NoMiso, Spi, SpiExt, MODE_0};
use stm32g0xx_hal::stm32g0::stm32g070::{RCC, SPI1, USART2};
use stm32g0xx_hal::time::U32Ext;

use crate::engine::AcquisitionEngine;
use crate::hw::adc::{Adc, Dma};
use crate::hw::timers::SampleTimer;
use crate::pga::Pga as GainPots;
use crate::BUFFER_SIZE;

pub fn init_clock(pac_rcc: RCC) -> Rcc {
    // ((16 MHz / 4) * 32) / 2 = 64 MHz
    let pll_config = PllConfig::with_hsi(4, 32, 2);
    pac_rcc.freeze(Config::pll().pll_cfg(pll_config))
}

// Analog inputs, see adc.rs
// PA0 - IN0 CH1 default source
// PA1, PA4, PA5 - IN1, IN4, IN5 CH2..CH4
// PA6, PA7, PB0 - IN6, IN7, IN8 CH2..CH4 shared sample and hold

// PA2 - USART2_TX
type HostTx = PA2<DefaultMode>;
// PA3 - USART2_RX
type HostRx = PA3<DefaultMode>;
// PB3 - SPI1_SCK
type PgaSck = PB3<DefaultMode>;
// PB5 - SPI1_MOSI
type PgaMosi = PB5<DefaultMode>;
// PB6 - PGA decoder A0
type PgaCs1 = PB6<Output<PushPull>>;
// PB7 - PGA decoder A1
type PgaCs2 = PB7<Output<PushPull>>;
// PB8 - PGA decoder A2
type PgaCs3 = PB8<Output<PushPull>>;
// ADC DMA channel
type DmaChannel = C1;

const HOST_BAUDRATE: u32 = 1_000_000;
const PGA_SPI_FREQUENCY: u32 = 1_000_000;

pub type HostSerial = Serial<USART2, FullConfig>;
pub type PgaSpi = Spi<SPI1, (PgaSck, NoMiso, PgaMosi)>;
pub type Pga = GainPots<PgaSpi, PgaCs1, PgaCs2, PgaCs3>;
pub type Engine = AcquisitionEngine<Adc, Dma<DmaChannel>, SampleTimer, BUFFER_SIZE>;

pub fn init_serial(
    usart: USART2,
    tx: HostTx,
    rx: HostRx,
    rcc: &mut Rcc,
) -> Result<HostSerial, InvalidConfig> {
    usart.usart(
        tx,
        rx,
        FullConfig::default().baudrate(HOST_BAUDRATE.bps()),
        rcc,
    )
}

pub fn init_pga(
    spi: SPI1,
    sck: PgaSck,
    mosi: PgaMosi,
    cs: (PgaCs1, PgaCs2, PgaCs3),
    rcc: &mut Rcc,
) -> Pga {
    let spi = spi.spi((sck, NoMiso, mosi), MODE_0, PGA_SPI_FREQUENCY.hz(), rcc);
    let (cs1, cs2, cs3) = cs;
    GainPots::new(spi, cs1, cs2, cs3)
}
