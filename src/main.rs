#![no_main]
#![no_std]

use lib as _;

use cortex_m::singleton;
use lib::command::Request;
use lib::hw::{init_clock, init_pga, init_serial, Adc, Dma, Engine, HostSerial, Pga, SampleTimer};
use lib::{Buffer, BUFFER_SIZE};
use rtic::app;
use stm32g0xx_hal::delay::DelayExt;
use stm32g0xx_hal::dma::DmaExt;
use stm32g0xx_hal::dmamux::DmaMuxIndex;
use stm32g0xx_hal::gpio::GpioExt;

#[app(device = stm32g0xx_hal::stm32, peripherals = true)]
const APP: () = {
    struct Resources {
        engine: Engine,
        serial: HostSerial,
        pga: Pga,
    }

    #[init]
    fn init(cx: init::Context) -> init::LateResources {
        let core: rtic::export::Peripherals = cx.core;
        let device: stm32g0xx_hal::stm32::Peripherals = cx.device;

        // Buffers
        let buffer: &'static mut Buffer = singleton!(: Buffer = [0; BUFFER_SIZE]).unwrap();

        // Clock
        let mut rcc = init_clock(device.RCC);
        let mut delay = core.SYST.delay(&mut rcc);

        // GPIO
        let gpioa = device.GPIOA.split(&mut rcc);
        let gpiob = device.GPIOB.split(&mut rcc);

        // Analog inputs
        gpioa.pa0.into_analog();
        gpioa.pa1.into_analog();
        gpioa.pa4.into_analog();
        gpioa.pa5.into_analog();
        gpioa.pa6.into_analog();
        gpioa.pa7.into_analog();
        gpiob.pb0.into_analog();

        // Host link
        let serial = init_serial(device.USART2, gpioa.pa2, gpioa.pa3, &mut rcc).unwrap();

        // Gain stage
        let pga = init_pga(
            device.SPI1,
            gpiob.pb3,
            gpiob.pb5,
            (
                gpiob.pb6.into_push_pull_output(),
                gpiob.pb7.into_push_pull_output(),
                gpiob.pb8.into_push_pull_output(),
            ),
            &mut rcc,
        );

        // Acquisition
        let dma = device.DMA.split(&mut rcc, device.DMAMUX);
        let mut ch1 = dma.ch1;
        ch1.mux().select_peripheral(DmaMuxIndex::ADC);
        let adc = Adc::new(device.ADC, &mut rcc, &mut delay);
        let clock = SampleTimer::new(device.TIM3, &mut rcc);
        let engine = Engine::new(adc, Dma::new(ch1), clock, buffer);

        defmt::info!("scope ready, {=usize} sample words", BUFFER_SIZE);

        init::LateResources {
            engine,
            serial,
            pga,
        }
    }

    #[idle(resources = [engine, serial, pga])]
    fn idle(mut cx: idle::Context) -> ! {
        let serial: &mut HostSerial = cx.resources.serial;
        let pga: &mut Pga = cx.resources.pga;

        loop {
            let request = match Request::read(serial) {
                Ok(request) => request,
                Err(error) => {
                    defmt::error!("host link read failed: {}", error);
                    continue;
                }
            };
            // Engine is locked per step, never across link writes
            if let Err(error) = request.execute(&mut cx.resources.engine, pga, serial) {
                defmt::error!("host link write failed: {}", error);
            }
        }
    }

    #[task(binds = ADC, priority = 2, resources = [engine])]
    fn adc(cx: adc::Context) {
        let engine: &mut Engine = cx.resources.engine;
        engine.on_conversion();
    }

    #[task(binds = DMA_CHANNEL1, priority = 2, resources = [engine])]
    fn dma(cx: dma::Context) {
        let engine: &mut Engine = cx.resources.engine;
        engine.on_transfer_complete();
    }
};
